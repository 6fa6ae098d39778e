use image::{Rgb, RgbImage};

use crate::quadtree::{Bounded, QuadTree, Rect};

pub const MAX_OVERLAY_SIZE: u32 = 4096;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const NODE_COLOR: Rgb<u8> = Rgb([160, 160, 160]);
const ITEM_COLOR: Rgb<u8> = Rgb([0, 128, 0]);

/// Draws the node partition and the stored boxes into a square image
/// covering the current root extent.
pub fn render_overlay<T: Bounded>(tree: &QuadTree<T>, size: u32) -> RgbImage {
    let size = size.clamp(1, MAX_OVERLAY_SIZE);
    let extent = tree.extent();
    let scale = size as f64 / extent.width;

    let mut image = RgbImage::from_pixel(size, size, BACKGROUND);

    tree.root().visit(&mut |node| {
        draw_outline(&mut image, node.rect(), &extent, scale, NODE_COLOR);
    });

    for (_, record) in tree.iter() {
        draw_outline(&mut image, &record.bounds(), &extent, scale, ITEM_COLOR);
    }

    image
}

/// maps a world coordinate to a pixel index clamped to the image
#[inline]
fn to_pixel(value: f64, origin: f64, scale: f64, size: u32) -> u32 {
    let px = ((value - origin) * scale).floor();
    px.clamp(0.0, (size - 1) as f64) as u32
}

fn draw_outline(image: &mut RgbImage, rect: &Rect, extent: &Rect, scale: f64, color: Rgb<u8>) {
    let (width, height) = image.dimensions();

    let left = to_pixel(rect.x, extent.x, scale, width);
    let right = to_pixel(rect.right(), extent.x, scale, width);
    let top = to_pixel(rect.y, extent.y, scale, height);
    let bottom = to_pixel(rect.bottom(), extent.y, scale, height);

    for x in left..=right {
        image.put_pixel(x, top, color);
        image.put_pixel(x, bottom, color);
    }
    for y in top..=bottom {
        image.put_pixel(left, y, color);
        image.put_pixel(right, y, color);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadtree::QuadTreeConfig;

    #[test]
    fn image_has_requested_size() {
        let tree = QuadTree::<Rect>::new(QuadTreeConfig::with_size(64)).unwrap();
        let image = render_overlay(&tree, 128);
        assert_eq!(image.dimensions(), (128, 128));

        let image = render_overlay(&tree, 0);
        assert_eq!(image.dimensions(), (1, 1));
    }

    #[test]
    fn items_and_nodes_are_drawn() {
        let config = QuadTreeConfig { origin_x: Some(0.0), origin_y: Some(0.0), ..QuadTreeConfig::with_size(64) };
        let mut tree = QuadTree::new(config).unwrap();
        for i in 0..4 {
            tree.insert(Rect::new(4.0 + 8.0 * i as f64, 40.0, 2.0, 2.0)).unwrap();
        }
        assert!(!tree.root().is_leaf());

        let image = render_overlay(&tree, 64);
        // root outline
        assert_eq!(*image.get_pixel(0, 0), NODE_COLOR);
        // split line through the middle
        assert_eq!(*image.get_pixel(32, 10), NODE_COLOR);
        // first item corner
        assert_eq!(*image.get_pixel(4, 40), ITEM_COLOR);
        assert_eq!(*image.get_pixel(20, 10), BACKGROUND);
    }
}
