use rand::Rng;

pub const CODE_PREFIX: &str = "VPN-";
pub const CODE_SUFFIX_LEN: usize = 8;

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a VPN code. Access must be checked by the caller.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_SUFFIX_LEN)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect();
    format!("{}{}", CODE_PREFIX, suffix)
}

/// Whether `code` has the shape produced by [`generate`].
#[cfg(test)]
pub fn is_well_formed(code: &str) -> bool {
    code.strip_prefix(CODE_PREFIX).is_some_and(|suffix| {
        suffix.len() == CODE_SUFFIX_LEN
            && suffix
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    })
}
