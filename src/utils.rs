/// Maps a UTF-16 code unit to its invariant upper-case form.
///
/// The mapping is locale-independent and strictly unit-to-unit: a unit is
/// replaced only when its uppercase image is a single scalar that fits in
/// the BMP. Expanding mappings (such as U+00DF) and unpaired surrogates
/// pass through unchanged.
#[inline]
pub(crate) fn to_upper_code_unit(c: u16) -> u16 {
    if c < 0x80 {
        return u16::from((c as u8).to_ascii_uppercase());
    }
    match char::from_u32(u32::from(c)) {
        Some(ch) => {
            let mut upper = ch.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(up), None) if (up as u32) <= 0xffff => up as u16,
                _ => c,
            }
        }
        None => c,
    }
}
