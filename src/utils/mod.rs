pub mod auto_reply;
pub mod bridge_days;
pub mod conflicts;
pub mod dates;
pub mod holidays;
