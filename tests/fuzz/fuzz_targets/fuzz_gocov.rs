#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding and model building must not panic on any input.
    if let Ok(run) = gocovview::gocov::parse(data) {
        let functions = gocovview::model::build(&run);
        let _ = gocovview::model::Summary::of(&functions).to_string();
    }
});
