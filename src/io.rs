use std::fs::File;
use std::ops::Deref;

/// An in-memory view of a trace file, either mapped or buffered depending on
/// the platform. Dereferences to the raw bytes the simulator consumes
pub enum TraceData {
    #[cfg(unix)]
    Mapped(memmap2::Mmap),
    Buffered(Vec<u8>),
}

impl Deref for TraceData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            #[cfg(unix)]
            TraceData::Mapped(map) => map,
            TraceData::Buffered(bytes) => bytes,
        }
    }
}

pub fn read_trace(file: File) -> Result<TraceData, String> {
    // Compatibility on other systems
    #[cfg(not(unix))]
    {
        use std::io::Read;
        let mut file = file;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| format!("Couldn't read the trace file: {e}"))?;
        Ok(TraceData::Buffered(bytes))
    }
    // Memory map the file for speed on unix systems
    #[cfg(unix)]
    {
        use memmap2::{Advice, Mmap};
        // The simulator only ever walks the buffer forwards, so advise the OS
        // that reads will be sequential
        unsafe {
            let map = Mmap::map(&file).map_err(|e| format!("Couldn't memory map the file: {e}"))?;
            map.advise(Advice::Sequential)
                .map_err(|e| format!("Failed to provide access advice to the OS, {e}"))?;
            Ok(TraceData::Mapped(map))
        }
    }
}
