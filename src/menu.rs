use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STAY_IN_FRONT: &str = "stay-in-front";
pub const OPEN_IN_EDITOR: &str = "open-in-editor";
pub const TOGGLE_DEVTOOLS: &str = "toggle-devtools";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
    pub checkbox: bool,
    pub checked: bool,
    pub enabled: bool,
    pub visible: bool,
}

impl MenuItem {
    pub fn action(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            checkbox: false,
            checked: false,
            enabled: true,
            visible: true,
        }
    }

    pub fn checkbox(id: &str, label: &str) -> Self {
        Self {
            checkbox: true,
            ..Self::action(id, label)
        }
    }

    fn apply(&mut self, patch: &MenuItemPatch) {
        if let Some(checked) = patch.checked {
            self.checked = checked;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(visible) = patch.visible {
            self.visible = visible;
        }
        if let Some(label) = &patch.label {
            self.label = label.clone();
        }
    }
}

/// Properties to overwrite on a menu item. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuItemPatch {
    pub checked: Option<bool>,
    pub enabled: Option<bool>,
    pub visible: Option<bool>,
    pub label: Option<String>,
}

impl MenuItemPatch {
    pub fn checked(checked: bool) -> Self {
        Self {
            checked: Some(checked),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Menu {
    pub id: String,
    pub label: String,
    pub items: Vec<MenuItem>,
}

/// The application menu. Items are addressed by stable id so patches keep
/// working when labels are localized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuModel {
    menus: Vec<Menu>,
}

impl Default for MenuModel {
    fn default() -> Self {
        Self {
            menus: vec![
                Menu {
                    id: "debugger".to_string(),
                    label: "Debugger".to_string(),
                    items: vec![
                        MenuItem::checkbox(STAY_IN_FRONT, "Stay in Front"),
                        MenuItem::checkbox(OPEN_IN_EDITOR, "Enable Open in Editor for Console Log"),
                    ],
                },
                Menu {
                    id: "view".to_string(),
                    label: "View".to_string(),
                    items: vec![MenuItem::action(TOGGLE_DEVTOOLS, "Toggle Developer Tools")],
                },
            ],
        }
    }
}

impl MenuModel {
    pub fn new(menus: Vec<Menu>) -> Self {
        Self { menus }
    }

    pub fn menus(&self) -> &[Menu] {
        &self.menus
    }

    pub fn item(&self, id: &str) -> Option<&MenuItem> {
        self.menus
            .iter()
            .flat_map(|menu| menu.items.iter())
            .find(|item| item.id == id)
    }

    /// Applies `patch` to the item with `id`. Returns `false` if no such item exists.
    pub fn patch(&mut self, id: &str, patch: &MenuItemPatch) -> bool {
        match self
            .menus
            .iter_mut()
            .flat_map(|menu| menu.items.iter_mut())
            .find(|item| item.id == id)
        {
            Some(item) => {
                item.apply(patch);
                true
            }
            None => {
                debug!("Menu item {} not found, skipping patch", id);
                false
            }
        }
    }

    /// Label-addressed variant: `{top-level label -> {item label -> patch}}`.
    /// Missing menus or items are skipped.
    pub fn patch_by_label(&mut self, patches: &BTreeMap<String, BTreeMap<String, MenuItemPatch>>) {
        for (menu_label, items) in patches {
            let Some(menu) = self.menus.iter_mut().find(|m| &m.label == menu_label) else {
                debug!("Menu {:?} not found", menu_label);
                continue;
            };
            for (item_label, patch) in items {
                match menu.items.iter_mut().find(|i| &i.label == item_label) {
                    Some(item) => item.apply(patch),
                    None => debug!("Menu item {:?} not found in {:?}", item_label, menu_label),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_by_id_updates_only_given_fields() {
        let mut menu = MenuModel::default();
        assert!(menu.patch(STAY_IN_FRONT, &MenuItemPatch::checked(true)));

        let item = menu.item(STAY_IN_FRONT).unwrap();
        assert!(item.checked);
        assert!(item.enabled);
        assert_eq!(item.label, "Stay in Front");
    }

    #[test]
    fn patch_unknown_id_is_a_no_op() {
        let mut menu = MenuModel::default();
        let before = menu.clone();
        assert!(!menu.patch("nope", &MenuItemPatch::checked(true)));
        assert_eq!(menu, before);
    }

    #[test]
    fn patch_by_label_merges_and_skips_missing() {
        let mut menu = MenuModel::default();
        let mut items = BTreeMap::new();
        items.insert(
            "Enable Open in Editor for Console Log".to_string(),
            MenuItemPatch {
                checked: Some(true),
                enabled: Some(false),
                ..Default::default()
            },
        );
        items.insert("Missing Item".to_string(), MenuItemPatch::checked(true));
        let mut patches = BTreeMap::new();
        patches.insert("Debugger".to_string(), items);
        patches.insert("Missing Menu".to_string(), BTreeMap::new());

        menu.patch_by_label(&patches);

        let item = menu.item(OPEN_IN_EDITOR).unwrap();
        assert!(item.checked);
        assert!(!item.enabled);
        assert!(!menu.item(STAY_IN_FRONT).unwrap().checked);
    }

    #[test]
    fn relabeled_item_is_still_patchable_by_id() {
        let mut menu = MenuModel::default();
        menu.patch(
            STAY_IN_FRONT,
            &MenuItemPatch {
                label: Some("Toujours devant".to_string()),
                ..Default::default()
            },
        );
        assert!(menu.patch(STAY_IN_FRONT, &MenuItemPatch::checked(true)));
        assert!(menu.item(STAY_IN_FRONT).unwrap().checked);
    }
}
