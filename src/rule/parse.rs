use std::str::FromStr;

use crate::error::ParseError;

use super::{HeadRule, SignedSurface};

/// Recursive-descent reader for the cell-definition grammar:
///
/// ```text
/// union  := inter (':' inter)*
/// inter  := factor*
/// factor := INT | '(' union ')' | '#' '(' union ')'
/// ```
///
/// Intersection binds tighter than union. Each number is passed through `map`
/// before it becomes a leaf, which lets offset templates resolve against a
/// surface block.
pub(crate) struct RuleParser<F> {
    chars: Vec<char>,
    pos: usize,
    map: F,
}

impl<F, E> RuleParser<F>
where
    F: FnMut(SignedSurface) -> Result<SignedSurface, E>,
    E: From<ParseError>,
{
    pub(crate) fn new(text: &str, map: F) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            map,
        }
    }

    pub(crate) fn parse(mut self) -> Result<HeadRule, E> {
        let rule = self.union()?;
        self.skip_ws();
        if let Some(&c) = self.chars.get(self.pos) {
            return Err(if c == ')' {
                ParseError::UnbalancedParen { position: self.pos }.into()
            } else {
                ParseError::UnexpectedChar {
                    position: self.pos,
                    found: c,
                }
                .into()
            });
        }
        Ok(rule)
    }

    fn skip_ws(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.get(self.pos).copied()
    }

    fn union(&mut self) -> Result<HeadRule, E> {
        let start = self.pos;
        let (first, first_empty) = self.intersection()?;
        let mut terms = vec![first];
        let mut any_empty = first_empty;
        while self.peek() == Some(':') {
            self.pos += 1;
            let (term, empty) = self.intersection()?;
            any_empty |= empty;
            terms.push(term);
        }
        if terms.len() > 1 && any_empty {
            return Err(ParseError::UnexpectedChar {
                position: start,
                found: ':',
            }
            .into());
        }
        Ok(HeadRule::unite_all(terms.iter()))
    }

    fn intersection(&mut self) -> Result<(HeadRule, bool), E> {
        let mut factors = Vec::new();
        while let Some(c) = self.peek() {
            if c == ':' || c == ')' {
                break;
            }
            factors.push(self.factor()?);
        }
        let empty = factors.is_empty();
        Ok((HeadRule::intersect_all(factors.iter()), empty))
    }

    fn factor(&mut self) -> Result<HeadRule, E> {
        let start = self.pos;
        match self.peek() {
            Some('(') => self.group(),
            Some('#') => {
                self.pos += 1;
                if self.peek() != Some('(') {
                    return Err(ParseError::BareComplement { position: start }.into());
                }
                Ok(self.group()?.complement())
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => self.number(),
            Some(c) => Err(ParseError::UnexpectedChar {
                position: self.pos,
                found: c,
            }
            .into()),
            None => Err(ParseError::UnbalancedParen { position: start }.into()),
        }
    }

    fn group(&mut self) -> Result<HeadRule, E> {
        let open = self.pos;
        self.pos += 1;
        let inner = self.union()?;
        if self.peek() != Some(')') {
            return Err(ParseError::UnbalancedParen { position: open }.into());
        }
        self.pos += 1;
        Ok(inner)
    }

    fn number(&mut self) -> Result<HeadRule, E> {
        let start = self.pos;
        let mut end = start + 1;
        while self.chars.get(end).is_some_and(char::is_ascii_digit) {
            end += 1;
        }
        let token: String = self.chars[start..end].iter().collect();
        self.pos = end;
        let value: i32 = token.parse().map_err(|_| ParseError::InvalidNumber {
            position: start,
            token: token.clone(),
        })?;
        let s = SignedSurface::new(value).ok_or_else(|| {
            if value == 0 {
                ParseError::ZeroSurface { position: start }
            } else {
                ParseError::InvalidNumber {
                    position: start,
                    token,
                }
            }
        })?;
        Ok(HeadRule::surface((self.map)(s)?))
    }
}

impl FromStr for HeadRule {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleParser::new(s, Ok::<_, ParseError>).parse()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn round_trip(text: &str) -> String {
        text.parse::<HeadRule>().unwrap().to_string()
    }

    #[test]
    fn parses_intersection() {
        assert_eq!(round_trip("1   -2 3"), "1 -2 3");
    }

    #[test]
    fn intersection_binds_tighter_than_union() {
        let r: HeadRule = "1 2 : 3".parse().unwrap();
        assert!(r.is_union());
        assert_eq!(r.to_string(), "1 2 : 3");
    }

    #[test]
    fn parses_nested_groups() {
        assert_eq!(round_trip("1 (2 : (3 -4)) 5"), "1 (2 : 3 -4) 5");
    }

    #[test]
    fn redundant_parentheses_are_flattened() {
        assert_eq!(round_trip("(1 (2 3))"), "1 2 3");
    }

    #[test]
    fn complement_group() {
        assert_eq!(round_trip("7 #(1 -2)"), "7 (-1 : 2)");
    }

    #[test]
    fn explicit_plus_sign() {
        assert_eq!(round_trip("+4 -5"), "4 -5");
    }

    #[test]
    fn empty_string_is_universe() {
        assert!("".parse::<HeadRule>().unwrap().is_universe());
        assert!("  ".parse::<HeadRule>().unwrap().is_universe());
    }

    #[test]
    fn null_round_trips() {
        let r: HeadRule = "#()".parse().unwrap();
        assert!(r.is_null());
        assert_eq!(r.to_string(), "#()");
    }

    #[test]
    fn unbalanced_open_paren() {
        assert_eq!(
            "1 (2 3".parse::<HeadRule>(),
            Err(ParseError::UnbalancedParen { position: 2 })
        );
    }

    #[test]
    fn unbalanced_close_paren() {
        assert_eq!(
            "1 2)".parse::<HeadRule>(),
            Err(ParseError::UnbalancedParen { position: 3 })
        );
    }

    #[test]
    fn zero_surface_rejected() {
        assert_eq!(
            "1 0".parse::<HeadRule>(),
            Err(ParseError::ZeroSurface { position: 2 })
        );
    }

    #[test]
    fn unnegatable_number_rejected() {
        assert_eq!(
            "1 -2147483648".parse::<HeadRule>(),
            Err(ParseError::InvalidNumber {
                position: 2,
                token: "-2147483648".into()
            })
        );
        let r: HeadRule = "-2147483647".parse().unwrap();
        assert_eq!(r.complement().to_string(), "2147483647");
    }

    #[test]
    fn garbage_rejected() {
        assert!(matches!(
            "1 x".parse::<HeadRule>(),
            Err(ParseError::UnexpectedChar { found: 'x', .. })
        ));
    }

    #[test]
    fn bare_minus_rejected() {
        assert!(matches!(
            "1 - 2".parse::<HeadRule>(),
            Err(ParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn dangling_union_rejected() {
        assert!("1 :".parse::<HeadRule>().is_err());
        assert!(": 2".parse::<HeadRule>().is_err());
    }

    #[test]
    fn bare_complement_rejected() {
        assert_eq!(
            "#5".parse::<HeadRule>(),
            Err(ParseError::BareComplement { position: 0 })
        );
    }
}
