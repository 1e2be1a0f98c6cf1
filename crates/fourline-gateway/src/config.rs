//! Gateway configuration.

use fourline_protocol::ROOM_CODE_LEN;

/// Tunables for a [`Gateway`](crate::Gateway).
///
/// ```rust
/// use fourline_gateway::GatewayConfig;
///
/// let config = GatewayConfig {
///     max_create_attempts: 10,
///     ..GatewayConfig::default()
/// };
/// assert_eq!(config.room_code_len, 6);
/// ```
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Length of generated room codes.
    ///
    /// Default: 6.
    pub room_code_len: usize,

    /// How many fresh codes `create_with_fresh_code` tries before giving
    /// up with `CreateCollision`. Values below 1 are treated as 1.
    ///
    /// Default: 5.
    pub max_create_attempts: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            room_code_len: ROOM_CODE_LEN,
            max_create_attempts: 5,
        }
    }
}
