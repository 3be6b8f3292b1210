mod projection;
mod vincenty;

pub(crate) use {
    projection::{mercator_forward, mercator_inverse, utm_forward, utm_inverse},
    vincenty::vincenty_distance,
};
