//! The assembled, immutable directive configuration

use super::definition::{DirectiveDefinition, KernelInfo};
use super::error::DirectiveConfigError;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Expression types every configuration understands.
pub const BUILTIN_EXPRESSION_TYPES: [&str; 2] = ["input", "password"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorLookup<'c> {
    NotFound,
    Kernel {
        kernel: &'c KernelInfo,
        definition: &'c DirectiveDefinition,
    },
    /// The name selects more than one kernel
    Ambiguous(Vec<&'c str>),
}

#[derive(Debug, Clone)]
pub struct DirectiveConfiguration {
    root: KernelInfo,
    kernels: Vec<KernelInfo>,
    default_kernel_name: Option<String>,
    expression_types: BTreeSet<String>,
    /// One selector per sub-kernel, index-aligned with `kernels`
    selectors: Vec<DirectiveDefinition>,
    selector_names: HashMap<String, Vec<usize>>,
}

impl Default for DirectiveConfiguration {
    /// A configuration with a bare root kernel and no sub-kernels.
    fn default() -> Self {
        Self::from_parts(KernelInfo::composite(".NET"), Vec::new(), None, BTreeSet::new())
    }
}

impl DirectiveConfiguration {
    pub fn builder(root: KernelInfo) -> DirectiveConfigurationBuilder {
        DirectiveConfigurationBuilder::new(root)
    }

    fn from_parts(
        root: KernelInfo,
        kernels: Vec<KernelInfo>,
        default_kernel_name: Option<String>,
        extra_expression_types: BTreeSet<String>,
    ) -> Self {
        let selectors: Vec<_> = kernels.iter().map(KernelInfo::selector).collect();

        let mut selector_names: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, selector) in selectors.iter().enumerate() {
            for name in selector.names() {
                let indices = selector_names.entry(name.to_string()).or_default();
                if !indices.contains(&index) {
                    indices.push(index);
                }
            }
        }

        let expression_types = BUILTIN_EXPRESSION_TYPES
            .iter()
            .map(|t| t.to_string())
            .chain(kernels.iter().map(|k| k.name.clone()))
            .chain(extra_expression_types)
            .collect();

        Self {
            root,
            kernels,
            default_kernel_name,
            expression_types,
            selectors,
            selector_names,
        }
    }

    pub fn root(&self) -> &KernelInfo {
        &self.root
    }

    pub fn kernels(&self) -> &[KernelInfo] {
        &self.kernels
    }

    /// A sub-kernel by name or alias, or the root by name.
    pub fn kernel(&self, name: &str) -> Option<&KernelInfo> {
        if self.root.name == name {
            return Some(&self.root);
        }
        self.kernels
            .iter()
            .find(|k| k.name == name)
            .or_else(|| self.kernels.iter().find(|k| k.has_name(name)))
    }

    /// The kernel code is attributed to before any selector. Falls back to the root.
    pub fn default_kernel_name(&self) -> &str {
        self.default_kernel_name
            .as_deref()
            .unwrap_or(self.root.name.as_str())
    }

    pub fn is_expression_type(&self, expression_type: &str) -> bool {
        self.expression_types.contains(expression_type)
    }

    pub fn expression_types(&self) -> impl Iterator<Item = &str> {
        self.expression_types.iter().map(String::as_str)
    }

    pub fn kernel_selector(&self, name: &str) -> SelectorLookup<'_> {
        match self.selector_names.get(name).map(Vec::as_slice) {
            None | Some([]) => SelectorLookup::NotFound,
            Some([index]) => SelectorLookup::Kernel {
                kernel: &self.kernels[*index],
                definition: &self.selectors[*index],
            },
            Some(indices) => SelectorLookup::Ambiguous(
                indices
                    .iter()
                    .map(|i| self.kernels[*i].name.as_str())
                    .collect(),
            ),
        }
    }

    /// The selector definition for a sub-kernel, by kernel name.
    pub fn selector_definition(&self, kernel_name: &str) -> Option<&DirectiveDefinition> {
        self.kernels
            .iter()
            .position(|k| k.name == kernel_name)
            .map(|index| &self.selectors[index])
    }

    /// An action directive visible from `scope_kernel`: its own directives first, then the
    /// root's. Returns the definition with the kernel that declares it.
    pub fn find_directive(
        &self,
        scope_kernel: &str,
        name: &str,
    ) -> Option<(&DirectiveDefinition, &KernelInfo)> {
        let scoped = self
            .kernels
            .iter()
            .find(|k| k.name == scope_kernel)
            .and_then(|kernel| kernel.find_directive(name).map(|d| (d, kernel)));
        scoped.or_else(|| self.root.find_directive(name).map(|d| (d, &self.root)))
    }

    /// A copy of this configuration with one more sub-kernel.
    pub fn with_kernel(&self, kernel: KernelInfo) -> Result<Self, DirectiveConfigError> {
        let mut builder = DirectiveConfiguration::builder(self.root.clone());
        for existing in &self.kernels {
            builder = builder.kernel(existing.clone());
        }
        if let Some(default) = &self.default_kernel_name {
            builder = builder.default_kernel(default.clone());
        }
        for expression_type in &self.expression_types {
            builder = builder.expression_type(expression_type.clone());
        }
        builder.kernel(kernel).build()
    }
}

#[derive(Debug, Clone)]
pub struct DirectiveConfigurationBuilder {
    root: KernelInfo,
    kernels: Vec<KernelInfo>,
    default_kernel_name: Option<String>,
    expression_types: BTreeSet<String>,
}

impl DirectiveConfigurationBuilder {
    pub fn new(root: KernelInfo) -> Self {
        Self {
            root,
            kernels: Vec::new(),
            default_kernel_name: None,
            expression_types: BTreeSet::new(),
        }
    }

    pub fn kernel(mut self, kernel: KernelInfo) -> Self {
        self.kernels.push(kernel);
        self
    }

    pub fn default_kernel(mut self, name: impl Into<String>) -> Self {
        self.default_kernel_name = Some(name.into());
        self
    }

    pub fn expression_type(mut self, expression_type: impl Into<String>) -> Self {
        self.expression_types.insert(expression_type.into());
        self
    }

    pub fn build(self) -> Result<DirectiveConfiguration, DirectiveConfigError> {
        let mut names = HashSet::new();
        names.insert(self.root.name.as_str());
        for kernel in &self.kernels {
            if !names.insert(kernel.name.as_str()) {
                return Err(DirectiveConfigError::DuplicateKernelName {
                    name: kernel.name.clone(),
                });
            }
        }

        if let Some(default) = &self.default_kernel_name {
            let known = self.root.name == *default || self.kernels.iter().any(|k| k.has_name(default));
            if !known {
                return Err(DirectiveConfigError::UnknownDefaultKernel {
                    name: default.clone(),
                });
            }
        }

        // Resolve an alias given as default to the kernel's name
        let default_kernel_name = self.default_kernel_name.map(|default| {
            self.kernels
                .iter()
                .find(|k| k.has_name(&default))
                .map_or(default, |k| k.name.clone())
        });

        Ok(DirectiveConfiguration::from_parts(
            self.root,
            self.kernels,
            default_kernel_name,
            self.expression_types,
        ))
    }
}
