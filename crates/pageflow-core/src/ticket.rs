//! Tickets de instancia: tokens opacos, no adivinables.
//!
//! `rand::thread_rng` es un CSPRNG sembrado desde el sistema operativo; los
//! bytes se codifican en base64 URL-safe sin relleno para que el ticket pueda
//! viajar en URLs, formularios o cookies sin escapar.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;

use crate::constants::INSTANCE_ID_BYTES;

pub fn generate_ticket() -> String {
    let mut bytes = [0u8; INSTANCE_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tickets_are_url_safe_and_distinct() {
        let tickets: HashSet<String> = (0..256).map(|_| generate_ticket()).collect();
        assert_eq!(tickets.len(), 256);
        for t in &tickets {
            assert_eq!(t.len(), 32);
            assert!(t.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }
}
