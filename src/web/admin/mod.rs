//! Admin API handlers. Every endpoint here is gated by the `Admin` extractor
//! on the router in `web::routes`.

pub mod availability;
pub mod bookings;
pub mod calendar_view;
pub mod calendars;
pub mod dashboard;
pub mod settings;
