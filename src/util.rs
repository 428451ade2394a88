/// Utility to output something as hex
pub struct Hex<'a>(&'a [u8], usize);

impl<'a> Hex<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self(data, data.len())
    }

    /// Show at most `len` bytes, followed by the total size
    pub fn partial(data: &'a [u8], len: usize) -> Self {
        Self(data, len)
    }
}

impl<'a> std::fmt::Debug for Hex<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl<'a> std::fmt::Display for Hex<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.len() > self.1 {
            write!(
                f,
                "[{}..., {} bytes]",
                hex::encode(&self.0[..self.1]),
                self.0.len()
            )
        } else {
            write!(f, "[{}]", hex::encode(self.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Hex;

    #[test]
    fn hex_formatting() {
        assert_eq!(Hex::new(b"ab").to_string(), "[6162]");
        assert_eq!(format!("{:?}", Hex::new(&[])), "[]");
        assert_eq!(
            Hex::partial(&[1, 2, 3, 4], 2).to_string(),
            "[0102..., 4 bytes]"
        );
    }
}
