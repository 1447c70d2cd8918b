//! Rows owned by a signed-in staff member: assigned bookings and the profile.
//!
//! Every operation takes the verified [`Identity`](crate::auth::Identity)
//! explicitly; nothing here looks up a "current user" on its own.

pub mod bookings;
pub mod profile;

pub use bookings::{BookedService, Booking, BookingId, StaffBookings, maps_search_url};
pub use profile::{StaffProfile, StaffProfiles};
