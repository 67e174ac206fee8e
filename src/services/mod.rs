pub mod auto_assignment;
pub mod init;
pub mod intervals;
pub mod localtime;
pub mod matcher;
pub mod reconciliation;
pub mod reminders;
pub mod strava;
pub mod telegram;
pub mod wattattack;
