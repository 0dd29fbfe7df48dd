use crate::{
    pdf::Name,
    writer::{Encoder, Writer},
};

use super::SimpleEncoder;

fn is_delimiter(chr: u8) -> bool {
    matches!(
        chr,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Bytes that can appear in a name without `#XX` escaping.
fn is_regular(chr: u8) -> bool {
    (b'!'..=b'~').contains(&chr) && !is_delimiter(chr) && chr != b'#'
}

impl Encoder<Name> for SimpleEncoder {
    fn write_to(n: &Name, writer: &mut dyn Writer) {
        let mut last_write = 0;
        writer.write(b"/");
        for (index, &c) in n.iter().enumerate() {
            if !is_regular(c) {
                writer.write(&n[last_write..index]);
                last_write = index + 1;
                writer.write(b"#");
                writer.write(hex::encode_upper([c]).as_bytes())
            }
        }
        writer.write(&n[last_write..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_encoded(name: &[u8], expected: &[u8]) {
        let mut out = Vec::new();
        SimpleEncoder::write_to(&Name::from(name), &mut out);
        assert_eq!(
            out,
            expected,
            "Expected {}, got {}",
            String::from_utf8_lossy(expected),
            String::from_utf8_lossy(&out)
        );
    }

    #[test]
    fn delimiter_in_the_middle() {
        assert_encoded(b"Hello World!", b"/Hello#20World!");
    }

    #[test]
    fn delimiter_start() {
        assert_encoded(b" HelloWorld!", b"/#20HelloWorld!");
    }

    #[test]
    fn delimiter_end() {
        assert_encoded(b"HelloWorld! ", b"/HelloWorld!#20");
    }

    #[test]
    fn only_delimiters() {
        assert_encoded(b"   ", b"/#20#20#20");
    }

    #[test]
    fn no_delimiters() {
        assert_encoded(b"HelloWorld!", b"/HelloWorld!");
    }

    #[test]
    fn number_sign_and_non_ascii() {
        assert_encoded(b"A#B", b"/A#23B");
        assert_encoded(b"Caf\xe9", b"/Caf#E9");
        assert_encoded(b"a/b", b"/a#2Fb");
    }
}
