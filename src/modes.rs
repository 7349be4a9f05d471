//! Scans a channel `MODE` string into `(adding, letter)` pairs.
//!
//! This module only tokenizes the sign/letter run; it knows nothing about
//! what a letter means or how many parameters it consumes. The dispatcher
//! owns that, since applying `o` requires resolving a nickname against the
//! registry and applying `k`/`l` requires consuming a parameter token,
//! neither of which this module has access to.

pub struct Scan<'a> {
    chars: std::str::Chars<'a>,
    adding: bool,
}

impl<'a> Scan<'a> {
    /// A leading sign defaults to `+` per the spec, so an absent sign at
    /// the very start of the string is treated as if `+` had been seen.
    pub fn new(mode_str: &'a str) -> Scan<'a> {
        Scan { chars: mode_str.chars(), adding: true }
    }
}

impl<'a> Iterator for Scan<'a> {
    type Item = (bool, char);

    fn next(&mut self) -> Option<(bool, char)> {
        loop {
            match self.chars.next()? {
                '+' => self.adding = true,
                '-' => self.adding = false,
                c => return Some((self.adding, c)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_sign_defaults_to_plus() {
        let scanned: Vec<_> = Scan::new("tk").collect();
        assert_eq!(scanned, vec![(true, 't'), (true, 'k')]);
    }

    #[test]
    fn signs_toggle_the_adder_for_subsequent_letters() {
        let scanned: Vec<_> = Scan::new("+o-o").collect();
        assert_eq!(scanned, vec![(true, 'o'), (false, 'o')]);
    }

    #[test]
    fn repeated_sign_with_no_letters_yields_nothing() {
        let scanned: Vec<_> = Scan::new("+-+").collect();
        assert!(scanned.is_empty());
    }
}
