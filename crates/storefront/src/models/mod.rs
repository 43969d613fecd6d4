//! Domain models for the storefront.

mod cart;
mod order;
mod report;
pub mod session;
mod user;

pub use cart::{CartItem, CartLine, CartView, total_price};
pub use order::{
    ADMIN_GENERATED_REFERENCE, NewOrder, NewOrderItem, Order, OrderDetails, OrderItem,
};
pub use report::{
    EducationalContent, Gradient, NewEducationalContent, NewReport, NewTestimonial, Report,
    Testimonial,
};
pub use user::{BirthDetails, NewUser, User};
