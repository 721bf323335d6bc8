//! Services layer - Business logic
//!
//! This module contains the business logic of the storefront and the news
//! desk. Services are responsible for:
//! - Implementing business rules
//! - Coordinating between repositories and cache
//! - Handling validation and error cases

pub mod banner;
pub mod cart;
pub mod category;
pub mod hero_slider;
pub mod mini_category;
pub mod news;
pub mod password;
pub mod pricing;
pub mod product;
pub mod review;
pub mod sub_category;
pub mod tab;
pub mod user;
pub mod wishlist;

pub use banner::{BannerService, BannerServiceError};
pub use cart::{CartAddResult, CartService, CartServiceError};
pub use category::{CategoryService, CategoryServiceError};
pub use hero_slider::{HeroSliderService, HeroSliderServiceError};
pub use mini_category::MiniCategoryService;
pub use news::{NewsService, NewsServiceError};
pub use password::{hash_password, verify_password};
pub use product::{ProductService, ProductServiceError};
pub use review::{ReviewService, ReviewServiceError};
pub use sub_category::SubCategoryService;
pub use tab::{TabService, TabServiceError};
pub use user::{
    ChangePasswordInput, CreateUserInput, LoginInput, RegisterInput, UserService, UserServiceError,
};
pub use wishlist::{WishlistService, WishlistServiceError};
