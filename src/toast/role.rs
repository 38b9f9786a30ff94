use crate::types::Role;

/// Position of a toast inside its container, supplied by the coordinator.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Placement {
    pub index: usize,
    pub count: usize,
    pub collapsed: bool,
}

impl Placement {
    pub const fn new(index: usize, count: usize, collapsed: bool) -> Self {
        Self {
            index,
            count,
            collapsed,
        }
    }

    pub const fn role(self) -> Role {
        role_for(self.index, self.count, self.collapsed)
    }
}

/// Role from distance to the end of the stack. Expanded stacks show every
/// toast as active.
pub const fn role_for(index: usize, count: usize, collapsed: bool) -> Role {
    if !collapsed {
        return Role::Active;
    }
    match count.saturating_sub(index + 1) {
        0 => Role::Active,
        1 => Role::Secondary,
        2 => Role::Tertiary,
        _ => Role::Hidden,
    }
}

#[cfg(test)]
mod tests {
    use super::{Placement, role_for};
    use crate::types::Role;

    fn roles(count: usize, collapsed: bool) -> String {
        (0..count)
            .map(|index| role_for(index, count, collapsed).to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn collapsed_roles_count_from_the_end() {
        insta::assert_snapshot!(roles(5, true), @"hidden hidden tertiary secondary active");
        insta::assert_snapshot!(roles(2, true), @"secondary active");
    }

    #[test]
    fn expanded_stacks_are_all_active() {
        insta::assert_snapshot!(roles(5, false), @"active active active active active");
    }

    #[test]
    fn out_of_range_index_is_treated_as_top() {
        assert_eq!(Placement::new(7, 3, true).role(), Role::Active);
        assert_eq!(Placement::default().role(), Role::Active);
    }
}
