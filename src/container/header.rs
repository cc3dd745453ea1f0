use crate::container::source::Stream;
use crate::foundation::error::{HoloreelError, HoloreelResult};

/// Fixed identifier opening every projection container.
pub const PROJECTION_MAGIC: [u8; 4] = *b"HLPR";

/// Container format version this engine build reads.
///
/// A mismatch is always a hard load failure; no best-effort partial read is
/// attempted across versions.
pub const IO_VERSION: u32 = 3;

/// Validate the fixed identifier and format version at the stream head.
///
/// On failure the stream is left unconsumed beyond the header and no state
/// is retained; the caller closes the stream.
pub(crate) fn read_header(stream: &mut Stream, expected_magic: [u8; 4]) -> HoloreelResult<()> {
    let mut actual = [0u8; 4];
    stream.read_exact(&mut actual)?;
    if actual != expected_magic {
        return Err(HoloreelError::IdentifierMismatch {
            expected: expected_magic,
            actual,
        });
    }

    let version = stream.read_u32()?;
    if version != IO_VERSION {
        return Err(HoloreelError::VersionMismatch {
            expected: IO_VERSION,
            actual: version,
        });
    }
    Ok(())
}
