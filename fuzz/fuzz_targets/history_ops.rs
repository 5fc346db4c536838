#![no_main]

use cartstream::history::PlaybackHistory;
use cartstream::model::{FileType, Item};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut history = PlaybackHistory::new();
    let library: Vec<Item> = (0..8u64)
        .map(|idx| {
            let file_type = if idx % 2 == 0 { FileType::Sid } else { FileType::Prg };
            Item::new(idx, format!("/lib/file_{idx}.{}", file_type.extension()), file_type)
        })
        .collect();

    for pair in data.chunks(2) {
        let op = pair[0];
        let pick = &library[usize::from(pair.get(1).copied().unwrap_or(0)) % library.len()];
        let filter: &[FileType] = match op / 8 % 3 {
            0 => &[],
            1 => &[FileType::Sid],
            _ => &[FileType::Prg],
        };
        match op % 8 {
            0 => history.add(pick.clone()),
            1 => {
                let _ = history.remove(pick);
            }
            2 => {
                let _ = history.next(op & 0x80 != 0, filter);
            }
            3 => {
                let _ = history.previous(op & 0x80 != 0, filter);
            }
            4 => history.load(library.iter().take(usize::from(op % 5)).cloned()),
            5 => {
                let _ = history.set_current(pick);
            }
            6 => {
                history.mark_incompatible(&pick.path);
            }
            _ => history.clear(),
        }

        if let Some(pointer) = history.pointer() {
            assert!(pointer < history.len());
        }
        for (position, entry) in history.entries().iter().enumerate() {
            assert_eq!(entry.sequence, position);
        }
    }
});
