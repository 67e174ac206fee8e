pub mod activity_repository;
pub mod assignment_repository;
pub mod client_repository;
pub mod notification_repository;
pub mod reservation_repository;
pub mod slot_repository;
pub mod stand_repository;
pub mod week_repository;

pub use activity_repository::ActivityRepository;
pub use assignment_repository::AssignmentRepository;
pub use client_repository::ClientRepository;
pub use notification_repository::WorkoutNotificationRepository;
pub use reservation_repository::ReservationRepository;
pub use slot_repository::SlotRepository;
pub use stand_repository::StandRepository;
pub use week_repository::{monday_of, WeekRepository};
