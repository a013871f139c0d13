#![no_main]
use libfuzzer_sys::fuzz_target;

use gocovview::offset;

fuzz_target!(|data: &[u8]| {
    // Offset translation and highlighting must not panic on arbitrary bytes.
    let queries: Vec<usize> = (0..=data.len()).collect();
    let chars = offset::char_offsets(data, &queries);
    for (byte, expected) in queries.iter().zip(&chars) {
        assert_eq!(offset::byte_to_char_offset(data, *byte), *expected);
    }
    let _ = offset::highlight_nicely(data, 0);
});
