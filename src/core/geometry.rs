use serde::{Deserialize, Serialize};

use crate::core::model::Paragraph;

/// Axis-aligned box in page coordinates, anchored at its top-left corner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }
}

/// Location of a paragraph: a box on a page, or nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub bounding_box: Option<BoundingBox>,
    pub page_number: Option<u32>,
}

/// Computes the representative region for a group of paragraphs being merged.
///
/// Only paragraphs carrying both a box and a page number take part. When they
/// all sit on one page the result is the smallest box covering them; when they
/// span pages the first located paragraph's region is used unchanged, since no
/// cross-page geometry is attempted.
pub fn combine_regions<'a, I>(paragraphs: I) -> Region
where
    I: IntoIterator<Item = &'a Paragraph>,
{
    let located: Vec<(BoundingBox, u32)> = paragraphs
        .into_iter()
        .filter_map(|p| Some((p.bounding_box?, p.page_number?)))
        .collect();

    let Some(&(first_box, first_page)) = located.first() else {
        return Region::default();
    };

    let same_page = located.iter().all(|(_, page)| *page == first_page);
    let bounding_box = if same_page {
        located
            .iter()
            .skip(1)
            .fold(first_box, |acc, (bbox, _)| acc.union(bbox))
    } else {
        first_box
    };

    Region {
        bounding_box: Some(bounding_box),
        page_number: Some(first_page),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn located(id: &str, bbox: BoundingBox, page: u32) -> Paragraph {
        Paragraph::new(id, None, "").with_region(bbox, page)
    }

    #[test]
    fn empty_input_has_no_region() {
        assert_eq!(combine_regions(&Vec::<Paragraph>::new()), Region::default());
    }

    #[test]
    fn unlocated_paragraphs_are_ignored() {
        let paragraphs = vec![Paragraph::new("a", None, "")];
        assert_eq!(combine_regions(&paragraphs), Region::default());
    }

    #[test]
    fn same_page_boxes_cover_min_and_max_corners() {
        let paragraphs = vec![
            located("a", BoundingBox::new(10.0, 20.0, 30.0, 5.0), 1),
            Paragraph::new("skip", None, ""),
            located("b", BoundingBox::new(5.0, 40.0, 10.0, 10.0), 1),
        ];
        let region = combine_regions(&paragraphs);
        let bbox = region.bounding_box.unwrap();
        assert_eq!(region.page_number, Some(1));
        assert_eq!((bbox.x, bbox.y), (5.0, 20.0));
        assert_eq!((bbox.right(), bbox.bottom()), (40.0, 50.0));
    }

    #[test]
    fn cross_page_falls_back_to_first_located() {
        let first = BoundingBox::new(1.0, 1.0, 2.0, 2.0);
        let paragraphs = vec![
            located("a", first, 3),
            located("b", BoundingBox::new(0.0, 0.0, 50.0, 50.0), 4),
        ];
        let region = combine_regions(&paragraphs);
        assert_eq!(region.bounding_box, Some(first));
        assert_eq!(region.page_number, Some(3));
    }
}
