use bstr::ByteSlice;

/// Only this many bases upstream of the 3' primer (or the read end) are searched.
const POLY_A_WINDOW: usize = 50;

/// Non-A bases tolerated while extending a tail toward the 5' end.
const MAX_NON_A: usize = 2;

/// Locate a poly-A tail near the 3' end of an oriented read.
///
/// Looks for the last run of `min_a_num` A's starting in the `POLY_A_WINDOW`
/// bases before `three_start` (the start of the 3' primer, if seen), then
/// extends it toward the 5' end over at most two non-A bases. Returns the
/// index of the first A of the tail.
///
/// The run may reach past `three_start`: a poly-T tagged primer overlaps the
/// first A's of the tail.
pub fn find_poly_a(seq: &[u8], min_a_num: usize, three_start: Option<usize>) -> Option<usize> {
    let end = three_start.unwrap_or(seq.len()).min(seq.len());
    let start = end.saturating_sub(POLY_A_WINDOW);
    let stop = (end + min_a_num.saturating_sub(1)).min(seq.len());
    let run = vec![b'A'; min_a_num];
    let mut first_a = start + seq[start..stop].rfind(&run)?;

    let mut non_a = 0;
    for i in (0..first_a).rev() {
        if seq[i] == b'A' {
            first_a = i;
        } else {
            non_a += 1;
            if non_a > MAX_NON_A {
                break;
            }
        }
    }
    Some(first_a)
}
