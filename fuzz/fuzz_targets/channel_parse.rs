#![no_main]

use chanmap_types::Channel;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(channel) = Channel::parse(s) {
            // The full name parses back to the same channel
            let full = channel.to_string();
            let reparsed = Channel::parse(&full).expect("full name must parse");
            assert_eq!(channel, reparsed);
            assert_eq!(reparsed.to_string(), full);
        }
    }
});
