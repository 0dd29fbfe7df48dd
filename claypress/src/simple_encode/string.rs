use crate::{
    pdf::{Bytes, CbString},
    simple_encode::SimpleEncoder,
    writer::{Encoder, Writer},
};

/// Literal form is used when every byte is printable ASCII or common
/// whitespace; everything else goes out as a hex string.
fn needs_hex(str: &[u8]) -> bool {
    str.iter()
        .any(|&c| !(b' '..=b'~').contains(&c) && !matches!(c, b'\n' | b'\r' | b'\t'))
}

/// Marks every parenthesis that has no partner. Those need to be escaped,
/// they would otherwise determine the end of the string.
fn unbalanced_parentheses(str: &[u8]) -> Vec<bool> {
    let mut unbalanced = vec![false; str.len()];
    let mut open = Vec::new();
    for (index, &c) in str.iter().enumerate() {
        match c {
            b'(' => open.push(index),
            b')' => {
                if open.pop().is_none() {
                    unbalanced[index] = true;
                }
            }
            _ => {}
        }
    }
    for index in open {
        unbalanced[index] = true;
    }
    unbalanced
}

impl Encoder<CbString> for SimpleEncoder {
    fn write_to(str: &CbString, writer: &mut dyn Writer) {
        if needs_hex(str) {
            return SimpleEncoder::write_to(&Bytes::from(&str[..]), writer);
        }

        writer.write(b"(");
        let unbalanced = unbalanced_parentheses(str);
        let mut last_written_index = 0;
        for (index, &c) in str.iter().enumerate() {
            let escape: &[u8] = match c {
                b'\\' => br"\\",
                b'\r' => br"\r",
                b'(' | b')' if unbalanced[index] => {
                    if c == b'(' {
                        br"\("
                    } else {
                        br"\)"
                    }
                }
                // skip all others.
                _ => continue,
            };
            writer.write(&str[last_written_index..index]);
            writer.write(escape);
            last_written_index = index + 1;
        }
        writer.write(&str[last_written_index..]);
        writer.write(b")");
    }
}

#[cfg(test)]
mod tests {
    use crate::{pdf::CbString, simple_encode::SimpleEncoder, writer::Encoder};

    fn encode(s: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        SimpleEncoder::write_to(&CbString::from(s.to_vec()), &mut out);
        out
    }

    #[test]
    fn test_simple() {
        assert_eq!(encode(b"abcdefg"), b"(abcdefg)".to_vec());
    }

    #[test]
    fn test_end_with_closing_paranthesis() {
        assert_eq!(encode(b"(abcdefg)"), b"((abcdefg))".to_vec());
    }

    #[test]
    fn test_end_with_unmatched_closing_paranthesis() {
        assert_eq!(encode(b"abcdefg)"), br"(abcdefg\))".to_vec());
    }

    #[test]
    fn test_many_unmatched_closing_paranthesis() {
        assert_eq!(encode(b")))))))))"), br"(\)\)\)\)\)\)\)\)\))".to_vec());
    }

    #[test]
    fn test_many_unmatched_opening_paranthesis() {
        assert_eq!(encode(b"((((((((("), br"(\(\(\(\(\(\(\(\(\()".to_vec());
    }

    #[test]
    fn test_many_matched_paranthesis() {
        assert_eq!(encode(b"((((((()))))))"), br"(((((((())))))))".to_vec());
    }

    #[test]
    fn test_many_unmatched_paranthesis() {
        assert_eq!(encode(b")))))((((("), br"(\)\)\)\)\)\(\(\(\(\()".to_vec());
    }

    #[test]
    fn test_partially_matched_paranthesis() {
        assert_eq!(encode(b"(()"), br"(\(())".to_vec());
    }

    #[test]
    fn test_backslash_and_carriage_return() {
        assert_eq!(encode(b"a\\b\rc"), br"(a\\b\rc)".to_vec());
    }

    #[test]
    fn test_binary_goes_hex() {
        assert_eq!(encode(b"\xfe\xff\x00A"), b"<FEFF0041>".to_vec());
    }
}
