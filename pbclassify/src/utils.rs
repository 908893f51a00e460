/// Return reverse complement of a DNA sequence. Case is preserved and
/// non-ACGT symbols are kept as they are.
pub fn rev_compl(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&x| match x {
            b'A' => b'T',
            b'T' => b'A',
            b'C' => b'G',
            b'G' => b'C',
            b'a' => b't',
            b't' => b'a',
            b'c' => b'g',
            b'g' => b'c',
            _ => x,
        })
        .collect()
}

/// Whether `needle` occurs anywhere in `haystack`.
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    use bstr::ByteSlice;
    haystack.find(needle).is_some()
}
