//! Per-context image rewrite resolution.
//!
//! Ordering of the resolved list matters to the consuming tool, which applies
//! the first rule that matches an image:
//!
//! 1. explicit rules from the context, in declared order;
//! 2. derived rules for pinned (tagged or digest) references, most recently
//!    seen first;
//! 3. derived rules for untagged references, in declared order.
//!
//! An explicit rule naming either the full reference or its repository
//! suppresses the derived rule for that reference. Derived rules are keyed on
//! the literal reference string, so `a` and `a:latest` each get their own.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, instrument};

use crate::context::Context;
use crate::diagnostics::Diagnostics;
use crate::image::{ImageRef, ImageRule};

/// Computes the final image rule list for a context.
pub struct ImageRewriteResolver<'a> {
    context: &'a Context,
}

impl<'a> ImageRewriteResolver<'a> {
    pub fn new(context: &'a Context) -> Self {
        Self { context }
    }

    /// Resolve against the application's images in declared order.
    ///
    /// Malformed references are recorded in `diagnostics` and skipped.
    #[instrument(skip_all, fields(context = %self.context.name))]
    pub fn resolve<S: AsRef<str>>(
        &self,
        images: &[S],
        diagnostics: &mut Diagnostics,
    ) -> Vec<ImageRule> {
        let mut derived: VecDeque<ImageRule> = VecDeque::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for reference in images.iter().map(AsRef::as_ref) {
            let image = match ImageRef::parse(reference) {
                Ok(image) => image,
                Err(e) => {
                    diagnostics.record(&e);
                    continue;
                }
            };

            if self.is_overridden(reference, &image) {
                debug!("Image `{}` has an explicit rule", reference);
                continue;
            }
            if !seen.insert(reference) {
                continue;
            }

            let mut rule = ImageRule::new(reference);
            if let Some(registry) = &self.context.registry {
                if image.is_unqualified() {
                    rule.new_name = Some(format!("{}/{}", registry, image.repository));
                }
            }

            if image.is_pinned() {
                derived.push_front(rule);
            } else {
                rule.new_tag = self.context.image_tag.clone();
                derived.push_back(rule);
            }
        }

        let resolved: Vec<ImageRule> = self
            .context
            .images
            .iter()
            .cloned()
            .chain(derived)
            .collect();
        debug!("Resolved {} image rule(s)", resolved.len());
        resolved
    }

    fn is_overridden(&self, reference: &str, image: &ImageRef) -> bool {
        self.context
            .images
            .iter()
            .any(|rule| rule.name == reference || rule.name == image.repository)
    }
}
