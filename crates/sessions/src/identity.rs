//! Transport identity helpers.
//!
//! Chat transports address users with qualified IDs such as
//! `5511999990000:20@s.whatsapp.net` (number, device, server).  Leads are
//! filed under the bare contact number.

/// Strip the `@server` and `:device` qualifiers from a transport user ID.
pub fn contact_address(user_id: &str) -> &str {
    let without_domain = user_id.split('@').next().unwrap_or(user_id);
    without_domain.split(':').next().unwrap_or(without_domain)
}
