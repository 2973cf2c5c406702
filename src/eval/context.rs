use crate::assemble::Assembly;
use crate::diagnostics::Remapper;

use super::RenderOptions;

/// Everything one render shares read-only across the whole walk: the
/// assembled source with its placeholders and tag bindings, the display
/// mapping used to quote expressions in errors, and the options.
pub(crate) struct Context {
    pub(crate) assembly: Assembly,
    pub(crate) remapper: Remapper,
    pub(crate) options: RenderOptions,
}

impl Context {
    pub(crate) fn new(assembly: Assembly, remapper: Remapper, options: RenderOptions) -> Self {
        Self {
            assembly,
            remapper,
            options,
        }
    }
}
