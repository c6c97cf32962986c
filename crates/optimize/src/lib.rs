pub mod recommend;
pub mod score;

pub use recommend::{
    optimization_recommendations, Priority, Recommendation, RecommendationKind,
};
pub use score::{find_optimal_card, CardComparison};
