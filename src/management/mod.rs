mod favourites;
mod session;

pub use favourites::FavouritesError;
pub use favourites::FavouritesManager;
pub use session::SessionManager;
