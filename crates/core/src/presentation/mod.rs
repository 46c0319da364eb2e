pub mod probability_renderer;
