pub(crate) const MAX_ARGS: usize = 255;

// Each nesting level costs about a dozen parser frames on the host stack.
pub(crate) const MAX_NESTING: usize = 128;

// Statements and expressions under evaluation at once, summed over every active call. This
// keeps the deepest evaluation at a couple of MiB of host stack, well below the 8 MiB main
// thread.
pub(crate) const MAX_EVAL_DEPTH: usize = 1000;
