use sse2_probe::probe;
use std::process::ExitCode;

// Exit 0 when SSE2 is available, 1 otherwise. Arguments are ignored and
// nothing is printed; callers branch on the status alone.
fn main() -> ExitCode {
    probe::sse2_status().into()
}
