pub mod notifications;
pub mod registrations;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub(crate) fn utc_now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
