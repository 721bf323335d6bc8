//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for a specific entity.

pub mod banner;
pub mod cart;
pub mod category;
pub mod counter;
pub mod mini_category;
pub mod news;
pub mod product;
pub mod review;
pub mod session;
pub mod sub_category;
pub mod tab;
pub mod user;
pub mod wishlist;

pub use banner::{BannerRepository, HeroSliderRepository, SqlxBannerRepository, SqlxHeroSliderRepository};
pub use cart::{CartAddOutcome, CartRepository, SqlxCartRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use counter::{CounterRepository, SqlxCounterRepository, BANNER_ID_SEQUENCE};
pub use mini_category::{MiniCategoryRepository, SqlxMiniCategoryRepository};
pub use news::{NewsFilter, NewsRepository, SqlxNewsRepository};
pub use product::{ProductFilter, ProductRepository, SqlxProductRepository};
pub use review::{ReviewRepository, SqlxReviewRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use sub_category::{SqlxSubCategoryRepository, SubCategoryRepository};
pub use tab::{SqlxTabRepository, TabRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use wishlist::{SqlxWishlistRepository, WishlistRepository};
