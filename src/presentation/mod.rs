// Presentation layer - coordinate mapping, renderers and pointer interactions
pub mod aggregated;
pub mod coordinates;
pub mod interaction;
pub mod redraw;
pub mod scatter;
pub mod surface;
pub mod timeseries;
