// Domain layer: models and ports. Concrete installers and stores live in core/ and shortener/.

pub mod model;
pub mod ports;
