/// Formats `bytes` as a hex dump, 16 bytes per line, labelling the first
/// byte with address `origin`.
pub fn hexdump(bytes: &[u8], origin: u16) -> String {
    let mut out = String::new();

    for (row, chunk) in bytes.chunks(16).enumerate() {
        let address = origin.wrapping_add((row * 16) as u16);
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let chars: String = chunk
            .iter()
            .map(|&b| {
                let c = b as char;
                if c.is_ascii_graphic() || c == ' ' {
                    c
                } else {
                    '.'
                }
            })
            .collect();

        out.push_str(&format!("{:04x}: {:<47} {}\n", address, hex.join(" "), chars));
    }

    out
}
