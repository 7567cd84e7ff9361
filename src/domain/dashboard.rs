// Dashboard domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::layout::{SectionGrid, clamp_columns};
use super::widget::{Filter, WidgetConfig, WidgetSize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub show_title: bool,
    pub config: WidgetConfig,
    #[serde(default)]
    pub size: WidgetSize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub show_title: bool,
    pub columns: u8,
    #[serde(default)]
    pub widgets: Vec<Widget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: String,
    pub title: String,
    /// View every widget on the dashboard queries
    pub view_id: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Applied server-side and never shown in the filter bar
    #[serde(default)]
    pub native_filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Persisted position and size of one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetPlacement {
    pub id: String,
    pub size: WidgetSize,
}

/// Persisted layout of one section: metadata plus widget ids in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionLayout {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub show_title: bool,
    pub columns: u8,
    #[serde(default)]
    pub widgets: Vec<WidgetPlacement>,
}

/// Move the element at `from` to position `to`, leaving every other element
/// in its relative order. Always returns a new collection.
pub fn splice_move<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut moved = items.to_vec();
    if from >= moved.len() || from == to {
        return moved;
    }
    let item = moved.remove(from);
    let to = to.min(moved.len());
    moved.insert(to, item);
    moved
}

impl Section {
    pub fn new(id: &str, title: &str, columns: u8) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            show_title: true,
            columns: clamp_columns(columns),
            widgets: Vec::new(),
        }
    }

    pub fn grid(&self) -> SectionGrid {
        SectionGrid::new(self.columns, self.widgets.iter().map(|w| w.size.width))
    }

    pub fn widget_index(&self, widget_id: &str) -> Option<usize> {
        self.widgets.iter().position(|w| w.id == widget_id)
    }

    /// Widget widths are left as declared; they clamp at render time.
    pub fn with_columns(&self, columns: u8) -> Section {
        Section {
            columns: clamp_columns(columns),
            ..self.clone()
        }
    }

    /// Replace the widget with the same id, or append it.
    pub fn with_widget(&self, widget: Widget) -> Section {
        let mut widgets = self.widgets.clone();
        match widgets.iter_mut().find(|w| w.id == widget.id) {
            Some(slot) => *slot = widget,
            None => widgets.push(widget),
        }
        Section {
            widgets,
            ..self.clone()
        }
    }

    pub fn without_widget(&self, widget_id: &str) -> Section {
        Section {
            widgets: self
                .widgets
                .iter()
                .filter(|w| w.id != widget_id)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Drop widget `from_id` onto widget `to_id`. `None` if either is missing.
    pub fn reorder_widgets(&self, from_id: &str, to_id: &str) -> Option<Section> {
        let from = self.widget_index(from_id)?;
        let to = self.widget_index(to_id)?;
        Some(Section {
            widgets: splice_move(&self.widgets, from, to),
            ..self.clone()
        })
    }

    pub fn with_widget_width(&self, widget_id: &str, width: u8) -> Section {
        let widgets = self
            .widgets
            .iter()
            .map(|w| {
                if w.id == widget_id {
                    Widget {
                        size: WidgetSize::new(width, w.size.height),
                        ..w.clone()
                    }
                } else {
                    w.clone()
                }
            })
            .collect();
        Section {
            widgets,
            ..self.clone()
        }
    }

    pub fn layout(&self) -> SectionLayout {
        SectionLayout {
            id: self.id.clone(),
            title: self.title.clone(),
            show_title: self.show_title,
            columns: self.columns,
            widgets: self
                .widgets
                .iter()
                .map(|w| WidgetPlacement {
                    id: w.id.clone(),
                    size: w.size,
                })
                .collect(),
        }
    }
}

impl Dashboard {
    pub fn new(id: &str, title: &str, view_id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            view_id: view_id.to_string(),
            sections: Vec::new(),
            native_filters: Vec::new(),
            updated_at: None,
        }
    }

    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    /// Section holding the widget, and the widget itself.
    pub fn find_widget(&self, widget_id: &str) -> Option<(&Section, &Widget)> {
        self.sections.iter().find_map(|s| {
            s.widgets
                .iter()
                .find(|w| w.id == widget_id)
                .map(|w| (s, w))
        })
    }

    pub fn with_section(&self, section: Section) -> Dashboard {
        let mut sections = self.sections.clone();
        match sections.iter_mut().find(|s| s.id == section.id) {
            Some(slot) => *slot = section,
            None => sections.push(section),
        }
        Dashboard {
            sections,
            ..self.clone()
        }
    }

    pub fn without_section(&self, section_id: &str) -> Dashboard {
        Dashboard {
            sections: self
                .sections
                .iter()
                .filter(|s| s.id != section_id)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    pub fn without_widget(&self, widget_id: &str) -> Dashboard {
        Dashboard {
            sections: self
                .sections
                .iter()
                .map(|s| s.without_widget(widget_id))
                .collect(),
            ..self.clone()
        }
    }

    pub fn reorder_sections(&self, from_id: &str, to_id: &str) -> Option<Dashboard> {
        let from = self.sections.iter().position(|s| s.id == from_id)?;
        let to = self.sections.iter().position(|s| s.id == to_id)?;
        Some(Dashboard {
            sections: splice_move(&self.sections, from, to),
            ..self.clone()
        })
    }

    pub fn layout(&self) -> Vec<SectionLayout> {
        self.sections.iter().map(Section::layout).collect()
    }

    /// Rebuild sections from a persisted layout. Widgets are looked up by id
    /// across the whole dashboard; ids with no matching widget are skipped.
    /// Widgets the layout does not mention stay at the end of their current
    /// section, so a layout captured before a widget was created cannot
    /// delete it. Widgets of sections missing from the layout are dropped.
    pub fn apply_layout(&self, layout: &[SectionLayout]) -> Dashboard {
        let placed: HashSet<&str> = layout
            .iter()
            .flat_map(|s| s.widgets.iter().map(|w| w.id.as_str()))
            .collect();

        let sections = layout
            .iter()
            .map(|section_layout| {
                let mut widgets: Vec<Widget> = section_layout
                    .widgets
                    .iter()
                    .filter_map(|placement| {
                        self.find_widget(&placement.id).map(|(_, w)| Widget {
                            size: placement.size,
                            ..w.clone()
                        })
                    })
                    .collect();
                if let Some(current) = self.section(&section_layout.id) {
                    widgets.extend(
                        current
                            .widgets
                            .iter()
                            .filter(|w| !placed.contains(w.id.as_str()))
                            .cloned(),
                    );
                }
                Section {
                    id: section_layout.id.clone(),
                    title: section_layout.title.clone(),
                    show_title: section_layout.show_title,
                    columns: clamp_columns(section_layout.columns),
                    widgets,
                }
            })
            .collect();
        Dashboard {
            sections,
            ..self.clone()
        }
    }
}
