/// Configuration problems caught while constructing a context.
///
/// Everything past construction is infallible by design: per-pixel
/// pathologies degrade into skipped candidates or empty reservoirs, never
/// into errors.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("render extents must be nonzero, got {width}x{height}")]
    InvalidRenderExtents { width: u32, height: u32 },

    #[error("{name} must be a nonzero power of two, got {value}")]
    NotAPowerOfTwo { name: &'static str, value: u32 },
}

pub type ContextResult<T> = Result<T, ContextError>;

pub(crate) fn ensure_pow2(name: &'static str, value: u32) -> ContextResult<()> {
    if value == 0 || !value.is_power_of_two() {
        return Err(ContextError::NotAPowerOfTwo { name, value });
    }

    Ok(())
}
