//! PDF Page Tree
//!
//! Flattens the hierarchical page tree of the catalog into an ordered list of
//! leaf pages. Internal nodes pass their inheritable attributes (Resources,
//! MediaBox, CropBox, Rotate) down to the pages beneath them.
//!
//! The walk is depth-first in `/Kids` order. Every node is visited at most
//! once: a node reached a second time (a cycle, or a node shared by two
//! parents) is logged as a structural cycle and its branch is skipped, so a
//! malformed tree still yields the pages collected so far.

use super::document::PdfDocument;
use super::objects::{ObjectId, PdfArray, PdfDictionary, PdfObject};
use std::collections::HashSet;
use std::sync::Arc;

/// A leaf page of the page tree with its inherited attributes applied.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Page object, `None` for a page given as a direct dictionary
    pub obj_ref: Option<ObjectId>,

    /// The page dictionary as stored in the file
    pub dict: PdfDictionary,

    /// Effective resource dictionary, own or inherited, already dereferenced
    pub resources: Option<PdfDictionary>,

    /// Page bounds [llx, lly, urx, ury] in default user space units
    pub media_box: [f64; 4],

    /// Visible area, if narrower than the MediaBox
    pub crop_box: Option<[f64; 4]>,

    /// Clockwise rotation in degrees, normalized to 0, 90, 180 or 270
    pub rotation: i32,
}

impl ParsedPage {
    pub fn width(&self) -> f64 {
        let width = self.media_box[2] - self.media_box[0];
        if self.rotation % 180 == 90 {
            self.media_box[3] - self.media_box[1]
        } else {
            width
        }
    }

    pub fn height(&self) -> f64 {
        let height = self.media_box[3] - self.media_box[1];
        if self.rotation % 180 == 90 {
            self.media_box[2] - self.media_box[0]
        } else {
            height
        }
    }

    pub fn get_resources(&self) -> Option<&PdfDictionary> {
        self.resources.as_ref()
    }

    pub fn has_contents(&self) -> bool {
        self.dict.contains_key("Contents")
    }
}

/// US Letter, used when no MediaBox is found on the page or its ancestors
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Attributes inherited from ancestor nodes, still unresolved
#[derive(Clone, Default)]
struct Inherited {
    resources: Option<PdfObject>,
    media_box: Option<PdfObject>,
    crop_box: Option<PdfObject>,
    rotate: Option<PdfObject>,
}

impl Inherited {
    fn descend(&self, node: &PdfDictionary) -> Self {
        let pick = |key: &str, parent: &Option<PdfObject>| node.get(key).cloned().or_else(|| parent.clone());
        Inherited {
            resources: pick("Resources", &self.resources),
            media_box: pick("MediaBox", &self.media_box),
            crop_box: pick("CropBox", &self.crop_box),
            rotate: pick("Rotate", &self.rotate),
        }
    }
}

/// The flattened page list of a document
#[derive(Debug, Default)]
pub struct PageTree {
    pages: Vec<ParsedPage>,
    structural_cycles: usize,
}

impl PageTree {
    /// Walk the tree below the catalog's `/Pages` entry
    pub fn from_catalog(doc: &PdfDocument, catalog: &PdfDictionary) -> Self {
        let mut tree = PageTree::default();
        let Some(root) = catalog.get("Pages") else {
            tracing::warn!("catalog has no /Pages entry, document has no pages");
            return tree;
        };

        let mut walker = Walker {
            doc,
            visited: HashSet::new(),
            max_depth: doc.options().max_tree_depth,
            tree: &mut tree,
        };
        walker.visit(root, &Inherited::default(), 0);
        tree
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[ParsedPage] {
        &self.pages
    }

    pub fn get(&self, index: usize) -> Option<&ParsedPage> {
        self.pages.get(index)
    }

    /// Nodes skipped because the walk had already visited them
    pub fn structural_cycles(&self) -> usize {
        self.structural_cycles
    }
}

struct Walker<'d, 't> {
    doc: &'d PdfDocument,
    visited: HashSet<ObjectId>,
    max_depth: usize,
    tree: &'t mut PageTree,
}

impl Walker<'_, '_> {
    fn visit(&mut self, node: &PdfObject, inherited: &Inherited, depth: usize) {
        if depth > self.max_depth {
            tracing::warn!("page tree deeper than {} levels, branch skipped", self.max_depth);
            return;
        }

        let obj_ref = node.as_reference();
        if let Some(id) = obj_ref {
            if !self.visited.insert(id) {
                tracing::warn!("structural cycle: page tree node {} reached twice, branch skipped", id);
                self.tree.structural_cycles += 1;
                return;
            }
        }

        let resolved = self.doc.resolve(node);
        let Some(dict) = resolved.as_dict() else {
            tracing::debug!("page tree node {} is a {}, skipped", label(obj_ref), resolved.type_name());
            return;
        };

        let is_tree_node = match dict.get_type() {
            Some("Pages") => true,
            Some("Page") => false,
            _ => dict.contains_key("Kids"),
        };

        if is_tree_node {
            let inherited = inherited.descend(dict);
            let kids = self.doc.resolve(dict.get("Kids").unwrap_or(&PdfObject::Null));
            match kids.as_array() {
                Some(kids) => self.visit_kids(kids, &inherited, depth),
                None => tracing::debug!("page tree node {} has no /Kids array", label(obj_ref)),
            }
        } else {
            let page = self.make_page(obj_ref, dict, &inherited.descend(dict));
            self.tree.pages.push(page);
        }
    }

    fn visit_kids(&mut self, kids: &PdfArray, inherited: &Inherited, depth: usize) {
        for kid in kids.iter() {
            self.visit(kid, inherited, depth + 1);
        }
    }

    fn make_page(&self, obj_ref: Option<ObjectId>, dict: &PdfDictionary, attrs: &Inherited) -> ParsedPage {
        let resources = attrs
            .resources
            .as_ref()
            .map(|obj| self.doc.resolve(obj))
            .and_then(|obj: Arc<PdfObject>| obj.as_dict().cloned());

        let media_box = attrs
            .media_box
            .as_ref()
            .and_then(|obj| self.rect(obj))
            .unwrap_or(DEFAULT_MEDIA_BOX);
        let crop_box = attrs.crop_box.as_ref().and_then(|obj| self.rect(obj));

        let rotation = attrs
            .rotate
            .as_ref()
            .and_then(|obj| self.doc.resolve(obj).as_integer())
            .map_or(0, |r| (r.rem_euclid(360) / 90 * 90) as i32);

        ParsedPage {
            obj_ref,
            dict: dict.clone(),
            resources,
            media_box,
            crop_box,
            rotation,
        }
    }

    fn rect(&self, obj: &PdfObject) -> Option<[f64; 4]> {
        let resolved = self.doc.resolve(obj);
        let array = resolved.as_array()?;
        if array.len() != 4 {
            return None;
        }
        let mut rect = [0.0; 4];
        for (slot, value) in rect.iter_mut().zip(array.iter()) {
            *slot = self.doc.resolve(value).as_real()?;
        }
        Some(rect)
    }
}

fn label(obj_ref: Option<ObjectId>) -> String {
    obj_ref.map_or_else(|| "(direct)".to_string(), |id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::test_helpers::TestPdf;
    use crate::parser::ParseOptions;

    fn open(pdf: TestPdf) -> PdfDocument {
        PdfDocument::open(pdf.build(), ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_nested_tree_order() {
        let doc = open(
            TestPdf::new()
                .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
                .object(2, "<< /Type /Pages /Kids [3 0 R 6 0 R] /Count 3 >>")
                .object(3, "<< /Type /Pages /Kids [4 0 R 5 0 R] /Count 2 >>")
                .object(4, "<< /Type /Page /Parent 3 0 R /Rotate 90 >>")
                .object(5, "<< /Type /Page /Parent 3 0 R >>")
                .object(6, "<< /Type /Page /Parent 2 0 R >>"),
        );
        let refs: Vec<u32> = doc
            .pages()
            .iter()
            .filter_map(|p| p.obj_ref.map(|id| id.number()))
            .collect();
        assert_eq!(refs, vec![4, 5, 6]);
        assert_eq!(doc.page(0).unwrap().rotation, 90);
        assert_eq!(doc.structural_cycles(), 0);
    }

    #[test]
    fn test_inherited_attributes() {
        let doc = open(
            TestPdf::new()
                .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
                .object(
                    2,
                    "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 /Resources 5 0 R /MediaBox [0 0 200 100] /Rotate -90 >>",
                )
                .object(3, "<< /Type /Page /Parent 2 0 R >>")
                .object(4, "<< /Type /Page /Parent 2 0 R /Resources << /Font << >> >> /MediaBox [0 0 10 20] >>")
                .object(5, "<< /ProcSet [/PDF /Text] >>"),
        );
        let first = doc.page(0).unwrap();
        assert!(first.get_resources().unwrap().contains_key("ProcSet"));
        assert_eq!(first.media_box, [0.0, 0.0, 200.0, 100.0]);
        assert_eq!(first.rotation, 270);
        assert_eq!(first.width(), 100.0);

        let second = doc.page(1).unwrap();
        assert!(second.get_resources().unwrap().contains_key("Font"));
        assert_eq!(second.media_box, [0.0, 0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_cycle_keeps_collected_pages() {
        let doc = open(
            TestPdf::new()
                .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
                .object(2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>")
                .object(3, "<< /Type /Page /Parent 2 0 R >>")
                // Points back at the root
                .object(4, "<< /Type /Pages /Kids [2 0 R 5 0 R] /Count 1 >>")
                .object(5, "<< /Type /Page /Parent 4 0 R >>"),
        );
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.structural_cycles(), 1);
        assert_eq!(doc.quality(), crate::parser::document::Quality::Recovered);
    }

    #[test]
    fn test_untyped_nodes_and_direct_kids() {
        let doc = open(
            TestPdf::new()
                .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
                .object(2, "<< /Kids [3 0 R << /Contents 9 0 R >>] >>")
                .object(3, "<< /MediaBox [0 0 1 1] >>"),
        );
        assert_eq!(doc.page_count(), 2);
        assert!(doc.page(1).unwrap().obj_ref.is_none());
        assert!(doc.page(1).unwrap().has_contents());
        assert_eq!(doc.page(1).unwrap().media_box, DEFAULT_MEDIA_BOX);
    }

    #[test]
    fn test_missing_kids_are_skipped() {
        let doc = open(
            TestPdf::new()
                .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
                .object(2, "<< /Type /Pages /Kids [3 0 R 7 0 R] /Count 2 >>")
                .object(3, "<< /Type /Page >>"),
        );
        assert_eq!(doc.page_count(), 1);
    }

    fn page_chain(levels: u32) -> Vec<u8> {
        let mut pdf = TestPdf::new().object(1, "<< /Type /Catalog /Pages 2 0 R >>");
        for n in 2..levels + 2 {
            pdf = pdf.object(n, &format!("<< /Type /Pages /Kids [{} 0 R] >>", n + 1));
        }
        pdf.object(levels + 2, "<< /Type /Page >>").build()
    }

    #[test]
    fn test_depth_limit() {
        let options = ParseOptions {
            max_tree_depth: 4,
            ..ParseOptions::default()
        };
        let doc = PdfDocument::open(page_chain(10), options).unwrap();
        assert_eq!(doc.page_count(), 0);

        let doc = PdfDocument::open(page_chain(10), ParseOptions::default()).unwrap();
        assert_eq!(doc.page_count(), 1);
    }
}
