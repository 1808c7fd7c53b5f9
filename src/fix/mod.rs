mod fix_aggregator;
mod position_fix;

pub use fix_aggregator::FixAggregator;
pub use position_fix::PositionFix;
