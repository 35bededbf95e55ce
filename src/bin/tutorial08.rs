use vkray::tutorials::animate::AnimateTutorial;

fn main() {
    vkray::app::run::<AnimateTutorial>();
}
