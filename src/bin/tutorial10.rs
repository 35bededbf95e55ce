use vkray::tutorials::instance_resources::InstanceResourcesTutorial;

fn main() {
    vkray::app::run::<InstanceResourcesTutorial>();
}
