//! Catalog types: reports, educational content and testimonials.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cosmic_blueprints_core::{ContentId, Price, ReportId, TestimonialId};

const DEFAULT_GRADIENT_FROM: &str = "#1a3a5f";
const DEFAULT_GRADIENT_TO: &str = "#3a7ca5";
const DEFAULT_AVATAR_COLOR: &str = "#d4af37";

/// Two-stop colour gradient used by catalog cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gradient {
    #[serde(default = "default_gradient_from")]
    pub gradient_from: String,
    #[serde(default = "default_gradient_to")]
    pub gradient_to: String,
}

impl Default for Gradient {
    fn default() -> Self {
        Self {
            gradient_from: default_gradient_from(),
            gradient_to: default_gradient_to(),
        }
    }
}

fn default_gradient_from() -> String {
    DEFAULT_GRADIENT_FROM.to_owned()
}

fn default_gradient_to() -> String {
    DEFAULT_GRADIENT_TO.to_owned()
}

/// A purchasable astrological report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    pub title: String,
    pub description: String,
    pub price: Price,
    pub category: String,
    pub preview_url: Option<String>,
    pub icon_name: Option<String>,
    pub rating: Decimal,
    pub review_count: i32,
    pub is_bestseller: bool,
    #[serde(flatten)]
    pub gradient: Gradient,
}

/// Data needed to create a [`Report`].
///
/// Doubles as the admin create-report request body and the seed file entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub category: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub icon_name: Option<String>,
    #[serde(default = "default_rating")]
    pub rating: Decimal,
    #[serde(default)]
    pub review_count: i32,
    #[serde(default)]
    pub is_bestseller: bool,
    #[serde(flatten)]
    pub gradient: Gradient,
}

fn default_rating() -> Decimal {
    Decimal::from(5)
}

impl NewReport {
    /// Check field-level constraints.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".to_owned());
        }
        if self.description.trim().is_empty() {
            return Err("description is required".to_owned());
        }
        if self.category.trim().is_empty() {
            return Err("category is required".to_owned());
        }
        if self.rating < Decimal::ZERO || self.rating > Decimal::from(5) {
            return Err("rating must be between 0 and 5".to_owned());
        }
        if self.review_count < 0 {
            return Err("reviewCount cannot be negative".to_owned());
        }
        Ok(())
    }

    /// Attach an id.
    #[must_use]
    pub fn into_report(self, id: ReportId) -> Report {
        Report {
            id,
            title: self.title,
            description: self.description,
            price: self.price,
            category: self.category,
            preview_url: self.preview_url,
            icon_name: self.icon_name,
            rating: self.rating,
            review_count: self.review_count,
            is_bestseller: self.is_bestseller,
            gradient: self.gradient,
        }
    }
}

/// A learning article. `content` is raw markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationalContent {
    pub id: ContentId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub icon_name: Option<String>,
    #[serde(flatten)]
    pub gradient: Gradient,
    pub content: String,
}

/// Data needed to create [`EducationalContent`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEducationalContent {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub icon_name: Option<String>,
    #[serde(flatten)]
    pub gradient: Gradient,
    pub content: String,
}

impl NewEducationalContent {
    /// Attach an id.
    #[must_use]
    pub fn into_content(self, id: ContentId) -> EducationalContent {
        EducationalContent {
            id,
            title: self.title,
            description: self.description,
            category: self.category,
            icon_name: self.icon_name,
            gradient: self.gradient,
            content: self.content,
        }
    }
}

/// A customer quote shown on the landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: TestimonialId,
    pub name: String,
    pub testimonial: String,
    pub report_name: String,
    pub rating: i16,
    pub avatar_color: String,
}

/// Data needed to create a [`Testimonial`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestimonial {
    pub name: String,
    pub testimonial: String,
    pub report_name: String,
    #[serde(default = "default_testimonial_rating")]
    pub rating: i16,
    #[serde(default = "default_avatar_color")]
    pub avatar_color: String,
}

const fn default_testimonial_rating() -> i16 {
    5
}

fn default_avatar_color() -> String {
    DEFAULT_AVATAR_COLOR.to_owned()
}

impl NewTestimonial {
    /// Attach an id.
    #[must_use]
    pub fn into_testimonial(self, id: TestimonialId) -> Testimonial {
        Testimonial {
            id,
            name: self.name,
            testimonial: self.testimonial,
            report_name: self.report_name,
            rating: self.rating,
            avatar_color: self.avatar_color,
        }
    }
}
