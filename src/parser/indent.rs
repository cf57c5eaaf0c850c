use crate::command::Indentation;
use crate::errors::ParseErrorKind;

/// Measures the depth of a raw line, returning it with the text after the
/// indentation.
///
/// Only the first indentation character decides what is counted; any other
/// configured indentation character directly after the run is an error.
pub fn measure<'a>(
    line: &'a str,
    indentations: &[Indentation],
) -> Result<(usize, &'a str), ParseErrorKind> {
    let first = match line.chars().next() {
        Some(first) => first,
        None => return Ok((0, line)),
    };
    let target = match indentations.iter().find(|indent| indent.ch == first) {
        Some(target) => target,
        None => return Ok((0, line)),
    };

    let count = line.chars().take_while(|&ch| ch == target.ch).count();
    let rest = &line[count * target.ch.len_utf8()..];

    if let Some(following) = rest.chars().next() {
        if indentations.iter().any(|indent| indent.ch == following) {
            return Err(ParseErrorKind::MixedIndentation);
        }
    }

    if count % target.width != 0 {
        return Err(ParseErrorKind::UnevenIndentation {
            count,
            width: target.width,
        });
    }

    Ok((count / target.width, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn units() -> Vec<Indentation> {
        vec![Indentation::new(' ', 4), Indentation::new('\t', 1)]
    }

    #[rstest]
    #[case("Tom: hi", 0, "Tom: hi")]
    #[case("", 0, "")]
    #[case("    Tom: hi", 1, "Tom: hi")]
    #[case("        -> yes", 2, "-> yes")]
    #[case("\tTom: hi", 1, "Tom: hi")]
    #[case("\t\t\tTom:  hi ", 3, "Tom:  hi ")]
    fn test_measure(#[case] line: &str, #[case] depth: usize, #[case] rest: &str) {
        assert_eq!(measure(line, &units()), Ok((depth, rest)));
    }

    #[rstest]
    #[case("    \tTom: hi")]
    #[case("\t    Tom: hi")]
    #[case("\t Tom: hi")]
    fn test_mixed(#[case] line: &str) {
        assert_eq!(measure(line, &units()), Err(ParseErrorKind::MixedIndentation));
    }

    #[rstest]
    #[case("  Tom: hi", 2)]
    #[case("      Tom: hi", 6)]
    fn test_uneven(#[case] line: &str, #[case] count: usize) {
        assert_eq!(
            measure(line, &units()),
            Err(ParseErrorKind::UnevenIndentation { count, width: 4 })
        );
    }

    #[test]
    fn test_custom_units() {
        let units = vec![Indentation::new(' ', 2)];
        assert_eq!(measure("    Tom: hi", &units), Ok((2, "Tom: hi")));
        // tabs aren't indentation unless configured
        assert_eq!(measure("\tTom: hi", &units), Ok((0, "\tTom: hi")));
    }
}
