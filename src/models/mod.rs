//! Data models
//!
//! This module contains the data structures shared by the repositories,
//! services and API handlers:
//! - Database entities (Product, Cart, Review, Category, News, User, ...)
//! - API request/response types
//! - Internal data transfer objects

mod banner;
mod cart;
mod category;
mod news;
mod product;
mod review;
mod session;
mod user;

pub use banner::{Banner, BannerInput, HeroSlider, HeroSliderInput};
pub use cart::{AddItemInput, CartLine, CartView, UpdateQuantityInput, WishlistLine, WishlistView};
pub use category::{
    is_image_data_url, Category, CategoryInput, MiniCategory, MiniCategoryInput, SubCategory, SubCategoryInput, Tab,
    TabInput,
};
pub use news::{
    CombinedNewsPage, CreateNewsInput, ImageMeta, ImageUpload, News, NewsBreakdown, NewsKind, StoredImage,
    UpdateNewsInput,
};
pub use product::{CreateProductInput, Product, ProductView, UpdateProductInput};
pub use review::{CreateReviewInput, ProductReviews, Review, UpdateReviewInput};
pub use session::Session;
pub use user::{UpdateUserDetailsInput, UpdateUserInput, User, UserDetails, UserRole};
