pub mod appointments;
pub mod doctor;
pub mod user;

pub use appointments::{
    Appointment, AppointmentStatus, AppointmentView, PaymentStatus, Prescription,
};
pub use doctor::{DayOfWeek, DoctorDetails, DoctorFields, DoctorFilter, DoctorProfile, DoctorSummary};
pub use user::{Identity, PartySummary, Role, UserView};
