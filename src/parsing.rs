use nom::{
    bytes::complete::take_while1,
    character::complete::{char, multispace0, space1},
    multi::separated_list1,
    sequence::delimited,
    IResult,
};

pub(crate) fn token(line: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_ascii_whitespace() && c != '}')(line)
}

/// Parse the brace-delimited header line of a correction parameter file
pub(crate) fn header_tokens(line: &str) -> IResult<&str, Vec<&str>> {
    delimited(
        char('{'),
        delimited(multispace0, separated_list1(space1, token), multispace0),
        char('}'),
    )(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header() {
        let line = "{1 JetEta 3 JetPt JetA Rho max(0.0001,1-z) Correction L1FastJet}";
        let (rest, tokens) = header_tokens(line).unwrap();
        assert!(rest.is_empty());
        assert_eq!(tokens.len(), 9);
        assert_eq!(tokens[0], "1");
        assert_eq!(tokens.last(), Some(&"L1FastJet"));
    }

    #[test]
    fn not_a_header() {
        assert!(header_tokens("1 JetEta 3 JetPt").is_err());
        assert!(header_tokens("{}").is_err());
    }
}
