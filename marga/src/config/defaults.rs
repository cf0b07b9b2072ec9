//! Default value functions for serde deserialization.

pub fn initial_capacity() -> usize {
    1024
}

pub fn max_children_per_node() -> usize {
    256
}

pub fn min_children_per_node() -> usize {
    128
}

pub fn heuristic_scale() -> f32 {
    1.0
}

pub fn max_nearest_node_distance() -> f32 {
    100.0
}

pub fn max_trace_length() -> usize {
    16_384
}

pub fn batch_size() -> usize {
    500
}

pub fn max_frame_time_ms() -> f32 {
    1.0
}

pub fn thread_time_slice_ms() -> f32 {
    10.0
}

pub fn enabled() -> bool {
    true
}
